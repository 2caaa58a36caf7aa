//! External collaborators of the router: trading data, key injection and
//! speech output.

pub mod keybindings;
pub mod keypress;
pub mod speech;
pub mod trading;
