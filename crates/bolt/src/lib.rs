//! Bolt runs parallel algorithms over host slices and containers living in accelerator memory.
//!
//! Every algorithm takes a [Control] deciding where the call runs: tiled kernels on the
//! accelerator, one partition per thread of the host pool, or a serial loop.
//!
//! ```
//! use bolt::prelude::*;
//!
//! let ctl = Control::new();
//! let values = DeviceVector::from_iter(&ctl, 1..=1024u64).unwrap();
//!
//! let sum = reduce_with::<Sum, _>(&ctl, &values).unwrap();
//! assert_eq!(sum, 524_800);
//! ```

pub use bolt_runtime::*;

pub use bolt_reduce as algorithm;
pub use bolt_std as containers;

/// Items needed by most programs.
pub mod prelude {
    pub use bolt_reduce::{
        reduce, reduce_with, transform_reduce, transform_reduce_with, Max, Min, Prod,
        ReduceInstruction, Sequence, Sum,
    };
    pub use bolt_runtime::{BoltError, Control, RunMode, WaitMode};
    pub use bolt_std::{DeviceIter, DeviceVector};
}
