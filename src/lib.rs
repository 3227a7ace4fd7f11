pub mod api;
pub mod batch;
pub mod config;
pub mod core;

pub use crate::api::BanknoteCropper;
pub use crate::config::PipelineConfig;

/// 安装日志后端；重复调用无副作用
pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("findcash"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp_millis()
            .try_init();
    }
}
