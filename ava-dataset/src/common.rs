pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{Transform, HW, XYXY};
pub use futures::stream::{self, StreamExt as _, TryStreamExt as _};
pub use indexmap::{IndexMap, IndexSet};
pub use itertools::Itertools as _;
pub use label::{ClassLabel, MultiLabel};
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use par_stream::prelude::*;
pub use rand::prelude::*;
pub use semver::{Version, VersionReq};
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
pub use std::{
    fmt,
    fmt::Debug,
    fs, io,
    num::NonZeroUsize,
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};

pub type Fallible<T> = Result<T, Error>;
