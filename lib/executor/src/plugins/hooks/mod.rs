pub mod on_subgraph_execute;
