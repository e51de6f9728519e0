pub mod params;
pub mod product;
