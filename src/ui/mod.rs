/// UI module exports
pub mod panel;
