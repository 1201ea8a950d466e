//! # System Interaction Layer
//!
//! Everything that touches the process table or signal dispositions.
//!
//! ## Modules
//!
//! - **`launcher`**: forks one child per command, applies redirection and
//!   signal dispositions in the child, and execs the program.
//! - **`supervisor`**: blocking waits on foreground children and the real
//!   `ProcessControl` used by the job registry.
//! - **`signals`**: the shell's own dispositions and the `SIGTSTP` mode toggle.
//! - **`stdio`**: the saved standard descriptors and their restore guard.

pub mod launcher;
pub mod signals;
pub mod stdio;
pub mod supervisor;
