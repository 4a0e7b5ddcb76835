pub mod conduit;
pub mod error;
pub mod escape;
pub mod list;
pub mod scope;
pub mod validate;
pub mod value;

pub use conduit::{Channel, Conduit, Pipe};
pub use error::{Loc, ShellError};
pub use scope::{Dict, Env, Frame, Reference};
pub use value::{intern, resolve, with_resolved, Cell, Closure, Labels, Number, Op, Status, Sym};
