mod connection_test;
mod inbox_test;
mod publish_test;
