mod reparent_test;
mod tree_test;
