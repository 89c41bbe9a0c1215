pub use anyhow::{ensure, Result};
pub use num_traits::Num;
pub use serde::{Deserialize, Serialize};
pub use std::ops::Mul;
