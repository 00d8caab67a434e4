pub mod health;
pub mod product_images;
