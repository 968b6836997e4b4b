use anyhow::Result;

fn main() -> Result<()> {
    trainprep::cli::run()
}
