// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod autorange;
pub mod fields;
pub mod highlight;
pub mod keymap;
pub mod ledger;
pub mod model;
pub mod state;

pub use autorange::*;
pub use fields::*;
pub use highlight::*;
pub use keymap::*;
pub use ledger::*;
pub use model::*;
pub use state::*;
