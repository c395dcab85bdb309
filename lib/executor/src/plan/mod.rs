pub mod plan_nodes;
