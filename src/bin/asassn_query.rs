use asassn_lc::fetch::HttpFetcher;
use asassn_lc::query::{parse_cli, CatalogQuery, QueryCli, QueryOutcome};
use asassn_lc::Result;

fn run(cli: QueryCli) -> Result<()> {
    let fetcher = HttpFetcher::new(cli.timeout)?;
    let outcome = CatalogQuery::new(&fetcher, cli.database)
        .host(&cli.host)
        .selection(cli.selection)
        .query(&cli.params, cli.save)?;
    match outcome {
        QueryOutcome::Downloaded { path, .. } => println!("{}", path.display()),
        QueryOutcome::Matched { record } => println!("{}", record.csv_url()),
        QueryOutcome::NoMatch { request_url } => {
            println!("no corresponding source found, request: {}", request_url)
        }
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = parse_cli();
    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
