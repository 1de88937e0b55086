//! Data generators for benchmarks

use fake::faker::company::en::*;
use fake::faker::lorem::en::*;
use fake::Fake;
use rand::Rng;
use vitrine::collection::RecordId;
use vitrine::entities::{Category, Product, PublishState};

/// Generates a category forest with ids already assigned.
///
/// Roughly one record in `fanout` is a root; every other record hangs under a
/// random earlier record.
pub fn generate_categories(count: usize, fanout: usize) -> Vec<Category> {
    let mut rng = rand::thread_rng();
    let mut ids: Vec<RecordId> = Vec::with_capacity(count);
    (0..count)
        .map(|i| {
            let id = RecordId::new();
            let parent = if ids.is_empty() || rng.gen_range(0..fanout.max(1)) == 0 {
                None
            } else {
                Some(ids[rng.gen_range(0..ids.len())])
            };
            ids.push(id);

            let name: String = Word().fake();
            let mut category = Category::new(&name, &format!("{}-{}", name.to_lowercase(), i))
                .with_parent(parent)
                .with_order(rng.gen_range(0..10));
            category.id = Some(id);
            category
        })
        .collect()
}

/// Generates catalog items; about one in `hit_every` carries `marker` in its title.
pub fn generate_products(count: usize, marker: &str, hit_every: usize) -> Vec<Product> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let company: String = CompanyName().fake();
            let title = if i % hit_every.max(1) == 0 {
                format!("{} {}", company, marker)
            } else {
                company
            };
            let description: String = Sentence(6..12).fake();
            let state = if rng.gen_bool(0.7) {
                PublishState::Published
            } else {
                PublishState::Draft
            };
            Product::new(&title, &format!("product-{}", i))
                .with_description(&description)
                .with_state(state)
        })
        .collect()
}
