use super::VERSION;
use crate::catalog::{
    extract_edr3_id, CatalogMatch, Database, QueryParams, ResultsTable, Selection, ASASSN_HOST,
    DISTANCE_COLUMN,
};
use crate::download::download_file;
use crate::error::{Error, Result};
use crate::fetch::{get_page, Fetch};
use clap::{App, AppSettings, Arg};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of one catalog query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// the light curve of the match was saved at `path`
    Downloaded { record: CatalogMatch, path: PathBuf },
    /// a match was found and saving was not requested
    Matched { record: CatalogMatch },
    /// the results table was empty
    NoMatch { request_url: String },
}

impl QueryOutcome {
    /// The saved file, with an empty result turned into `Error::NoMatchFound`.
    pub fn into_path(self) -> Result<Option<PathBuf>> {
        match self {
            QueryOutcome::Downloaded { path, .. } => Ok(Some(path)),
            QueryOutcome::Matched { .. } => Ok(None),
            QueryOutcome::NoMatch { request_url } => Err(Error::NoMatchFound { url: request_url }),
        }
    }
}

/// Queries one ASAS-SN database and downloads the light curve of the match.
pub struct CatalogQuery<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    database: Database,
    host: String,
    selection: Selection,
    output_root: PathBuf,
}

impl<'a, F: Fetch + ?Sized> CatalogQuery<'a, F> {
    pub fn new(fetcher: &'a F, database: Database) -> Self {
        CatalogQuery {
            fetcher,
            database,
            host: ASASSN_HOST.to_string(),
            selection: Selection::First,
            output_root: PathBuf::from("."),
        }
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.trim_end_matches('/').to_string();
        self
    }

    pub fn selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Directory under which the database output directory is created.
    pub fn output_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.output_root = root.as_ref().to_path_buf();
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_root.join(self.database.output_dir())
    }

    pub fn query(&self, params: &QueryParams, save: bool) -> Result<QueryOutcome> {
        let url = self.database.search_url(&self.host, params);
        log::info!("request URL: {}", url);
        let page = get_page(self.fetcher, &url)?;
        let table = ResultsTable::from_html(&page)?;

        if table.is_empty() {
            log::info!(
                "no corresponding source found in the ASAS-SN {}, request: {}",
                self.database.name(),
                url
            );
            return Ok(QueryOutcome::NoMatch { request_url: url });
        }
        log::info!("{} result row(s)", table.rows.len());

        table.require_columns(self.database.required_columns())?;
        let index = table.select(self.selection, params.position());
        let record = CatalogMatch::from_row(&table, index, &self.host)?;
        log::info!("closest source:\n{}", record);

        let file_name = match self.database {
            Database::Variables => {
                let detail = get_page(self.fetcher, &record.href)?;
                let edr3_id = extract_edr3_id(&detail)?;
                log::info!("Gaia EDR3 ID: {}", edr3_id);
                format!("EDR3_{}.csv", edr3_id)
            }
            Database::Photometry => format!(
                "RA{}_DEC{}_Distance{}arcsec.csv",
                params.ra,
                params.dec,
                checked_distance(record.require(DISTANCE_COLUMN)?)?
            ),
        };

        if !save {
            return Ok(QueryOutcome::Matched { record });
        }

        let dir = self.output_dir();
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        download_file(self.fetcher, &record.csv_url(), &path)?;
        Ok(QueryOutcome::Downloaded { record, path })
    }
}

/// The distance cell ends up in a file name, so it must be a plain number.
fn checked_distance(distance: &str) -> Result<&str> {
    match distance.parse::<f64>() {
        Ok(d) if d.is_finite() => Ok(distance),
        _ => Err(Error::Parse(format!(
            "'{}' is not a valid {} value",
            distance, DISTANCE_COLUMN
        ))),
    }
}

/// Settings of the `asassn_query` app.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCli {
    pub params: QueryParams,
    pub database: Database,
    pub selection: Selection,
    pub save: bool,
    pub timeout: Option<Duration>,
    pub host: String,
}

/// Takes the CLI arguments for the catalog query, exits on invalid input.
pub fn parse_cli() -> QueryCli {
    parse_cli_from(std::env::args_os()).unwrap_or_else(|e| e.exit())
}

/// Parses the catalog query arguments; `args` starts with the program name.
/// Negative and sexagesimal coordinates (`-34.5`, `-00:30:00`) are values, not flags.
pub fn parse_cli_from<I, T>(args: I) -> std::result::Result<QueryCli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_ra = Arg::with_name("ra")
        .help("right ascension, degrees")
        .allow_hyphen_values(true)
        .required(true)
        .index(1);
    let arg_dec = Arg::with_name("dec")
        .help("declination, degrees")
        .allow_hyphen_values(true)
        .required(true)
        .index(2);
    let arg_radius = Arg::with_name("radius")
        .help("search radius, arcmin")
        .default_value("1")
        .index(3);
    let arg_database = Arg::with_name("database")
        .help("ASAS-SN database to search")
        .short("d")
        .long("database")
        .takes_value(true)
        .possible_values(&["variables", "photometry"])
        .default_value("variables");
    let arg_select = Arg::with_name("select")
        .help("which result row to download")
        .long_help(
            "first: trust the catalog ordering (ascending RA); \
            nearest: compute the angular distance of every row to the query position",
        )
        .short("s")
        .long("select")
        .takes_value(true)
        .possible_values(&["first", "nearest"])
        .default_value("first");
    let arg_no_save = Arg::with_name("no_save")
        .help("only report the match, do not download the light curve")
        .long("no-save")
        .takes_value(false);
    let arg_timeout = Arg::with_name("timeout")
        .help("HTTP timeout in seconds, unbounded if not given")
        .long("timeout")
        .takes_value(true);
    let arg_host = Arg::with_name("host")
        .help("catalog host")
        .long("host")
        .takes_value(true)
        .default_value(ASASSN_HOST);
    let cli_args = App::new("asassn_query")
        .version(VERSION.unwrap_or("unknown"))
        .author("Luca Peruzzo")
        .about("cli app to download the ASAS-SN light curve of the source closest to ra, dec")
        .setting(AppSettings::AllowNegativeNumbers)
        .setting(AppSettings::AllowLeadingHyphen)
        .arg(arg_ra)
        .arg(arg_dec)
        .arg(arg_radius)
        .arg(arg_database)
        .arg(arg_select)
        .arg(arg_no_save)
        .arg(arg_timeout)
        .arg(arg_host)
        .get_matches_from_safe(args)?;

    let params = QueryParams::new(
        cli_args.value_of("ra").unwrap_or_default(),
        cli_args.value_of("dec").unwrap_or_default(),
        cli_args.value_of("radius"),
    );
    let database = cli_args
        .value_of("database")
        .and_then(Database::from_name)
        .unwrap_or(Database::Variables);
    let selection = cli_args
        .value_of("select")
        .and_then(Selection::from_name)
        .unwrap_or(Selection::First);
    let timeout = match cli_args.value_of("timeout").map(|t| t.parse::<f64>()) {
        Some(Ok(s)) if s > 0. => Some(Duration::from_secs_f64(s)),
        Some(_) => {
            return Err(clap::Error::with_description(
                "timeout must be a positive number of seconds",
                clap::ErrorKind::InvalidValue,
            ))
        }
        None => None,
    };
    Ok(QueryCli {
        params,
        database,
        selection,
        save: !cli_args.is_present("no_save"),
        timeout,
        host: String::from(cli_args.value_of("host").unwrap_or(ASASSN_HOST)),
    })
}
