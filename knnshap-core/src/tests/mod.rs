mod test_matrix;
mod test_preflight;
