mod pagination_test;
mod search_test;
