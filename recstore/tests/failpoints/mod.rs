mod client_test;
