pub mod review;

pub use review::{
    AnalyzerStatus, ComponentType, ResultRecord, ReviewRun, ReviewState, ReviewWindow,
};
