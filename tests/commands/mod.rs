mod test_graphrag;
