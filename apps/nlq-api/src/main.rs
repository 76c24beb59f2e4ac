use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = nlq_api::Args::parse();

	nlq_api::run(args).await
}
