mod settings;

pub use settings::{
    EngineConfig, LogConfig, SchedulerConfig, Settings, StoreConfig, DEFAULT_ELIGIBLE_SELECTORS,
};
