//! Library to rotate the backups of your [SQL Server on Linux][mssql] instance.
//!
//! The SQL Server backup job writes `.bak` and `.trn` files to a backup
//! directory. This library deletes all but the newest of them according to a
//! [`RetentionPolicy`](rotation::RetentionPolicy). The rotation itself lives
//! in the [`rotation`] module.
//!
//! [mssql]: https://learn.microsoft.com/sql/linux/sql-server-linux-overview

#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod report;
pub mod rotation;
pub mod util;
