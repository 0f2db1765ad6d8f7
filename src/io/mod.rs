//! Reading and writing matrices, sample tables and fit summaries

mod matrix;
mod results;
mod sample_table;

pub use matrix::{read_matrix, read_matrix_from, write_matrix, write_matrix_to};
pub use results::{write_summaries, write_summaries_json, write_summaries_tsv, SummaryFormat};
pub use sample_table::{read_sample_table, read_sample_table_from};
