//! Store setup for benchmarks

use crate::data_gen::generate_products;
use vitrine::connection::Connection;
use vitrine::entities::ProductRepository;
use vitrine::errors::VitrineResult;

/// A fresh in-memory connection with `count` seeded products.
pub async fn seeded_products(count: usize, marker: &str) -> VitrineResult<ProductRepository> {
    let repository = ProductRepository::new(Connection::in_memory());
    for product in generate_products(count, marker, 10) {
        repository.create(product).await?;
    }
    Ok(repository)
}

pub fn runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}
