use hiring_workflow_api::run;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("hiring workflow error: {err}");
        std::process::exit(1);
    }
}
