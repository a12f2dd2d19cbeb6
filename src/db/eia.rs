pub mod lib_eia;
pub mod retail_price;
pub mod retail_price_archive;
