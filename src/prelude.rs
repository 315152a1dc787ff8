//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types from the sagasu crate.
//!
//! # Example
//!
//! ```rust,no_run
//! use sagasu::prelude::*;
//!
//! # fn run_example() -> Result<(), DatabaseError> {
//! let db = Database::open("path/to/database")?;
//! let recipe = db.get(0)?;
//! println!("{:?} is worth {}", recipe.slots, recipe.value);
//! # Ok(())
//! # }
//! ```

// Session
pub use crate::config::Config;
pub use crate::host::{EventSink, Host, HostEvent, NullSink, Operation};

// Store
pub use crate::catalog::{ActorId, Catalog, EMPTY_GROUP, GroupId};
pub use crate::modifier::ModifierSet;
pub use crate::store::{Database, DatabaseBuilder, Recipe, RecipeEntry};

// Queries
pub use crate::query::{GroupStat, ResultSet, ResultStorage, SearchFilter, Stats};
pub use crate::signal::AbortSignal;
pub use crate::stages::cook::{CookOutput, OptimizedRecipeData};

// Error types
pub use crate::error::{DatabaseError, HostError};
