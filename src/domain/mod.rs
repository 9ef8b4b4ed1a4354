// Domain layer - Battery models and core algorithms
pub mod balancing;
pub mod estimator;
pub mod measurement;
pub mod ocv;
pub mod protection;
pub mod snapshot;
