pub mod te_slicing;
