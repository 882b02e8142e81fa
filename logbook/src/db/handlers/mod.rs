//! Repositories for each record kind.
//!
//! All three kinds share one generic implementation, [`Records`], parameterised by the
//! entity type. The aliases below are what handlers use.
//!
//! # Common Pattern
//!
//! ```ignore
//! use logbook::db::handlers::Accounts;
//!
//! async fn example(store: Arc<dyn DocumentStore>, account: Account) -> anyhow::Result<()> {
//!     let accounts = Accounts::new(store);
//!     let reference = accounts.update_or_add(&account).await?;
//!     let stored = accounts.by_unique_key(&account.uid).await?;
//!     Ok(())
//! }
//! ```

pub mod repository;

use crate::db::models::{accounts::Account, entries::Entry, labels::Label};

pub use repository::Records;

pub type Accounts = Records<Account>;
pub type Entries = Records<Entry>;
pub type Labels = Records<Label>;
