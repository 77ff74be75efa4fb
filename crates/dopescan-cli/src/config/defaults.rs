pub struct DefaultsConfig {
    pub topk: usize,
    pub max_enum: u64,
    pub max_unique: usize,
    pub batch_size: usize,
    pub symprec: f64,
    pub max_group_order: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            topk: 15,
            max_enum: 50_000_000,
            max_unique: 200_000,
            batch_size: 50,
            symprec: 1e-3,
            max_group_order: 100_000,
        }
    }
}
