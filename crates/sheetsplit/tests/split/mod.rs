// Shared test helpers (umya workbook builders, archive readers)
#[path = "../common.rs"]
mod common;

mod basics;
mod formatting;
mod formulas;
mod modes;
