mod cluster;
mod matrix;
mod misc;
mod scrollbar;
mod summary;
mod table;
mod users;

pub use cluster::{dashboard_lines, plain_text, ClusterPane, ClusterState};
pub use scrollbar::RightScrollbar;
pub use users::{account_lines, UsersTable, UsersTableState};
