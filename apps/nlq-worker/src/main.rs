use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = nlq_worker::Args::parse();

	nlq_worker::run(args).await
}
