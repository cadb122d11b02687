mod builder;
mod workflow;
