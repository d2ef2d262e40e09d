pub trait WorkflowTrigger {
    /// Starts an execution and returns its identifier.
    fn start(&self, workflow_arn: &str, input: &str) -> Result<String, String>;
}
