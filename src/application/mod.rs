//! Application Layer
//!
//! The swapper itself, the serialized transaction front door, and
//! configuration-driven deployment.

pub mod chain;
pub mod deploy;
pub mod swapper;

pub use chain::{Chain, Receipt};
pub use deploy::{DeployedToken, Deployment, DeploymentError};
pub use swapper::{Erc20Swapper, SwapperError};
