mod config;
pub mod journal;
pub mod logging;

pub use config::{
    CLASSIFIER_ENV, DEFAULT_CLASSIFIER, DEFAULT_CLASSIFIER_TIMEOUT_SECS, MAX_INPUT_DIRS,
    PROGRAM_NAME, SNAPSHOT_PREFIX, SNAPSHOT_SUFFIX, default_classifier, state_dir,
};

pub use logging::init;
