//! ASAS-SN catalog pages: search URLs, the results table and the detail page.

use crate::error::{Error, Result};
use crate::sky;
use scraper::{ElementRef, Html, Selector};

pub const ASASSN_HOST: &str = "https://asas-sn.osu.edu";

/// Label of the detail-page field holding the Gaia EDR3 source id.
pub const EDR3_LABEL: &str = "EDR3_ID";

/// Results-table column with the match distance in the photometry database.
pub const DISTANCE_COLUMN: &str = "Distance (arcsec)";

const VARIABLES_FILTERS: &str = "vmag_min=&vmag_max=&amplitude_min=&amplitude_max=\
&period_min=&period_max=&lksl_min=&lksl_max=&class_prob_min=&class_prob_max=\
&parallax_over_err_min=&parallax_over_err_max=&name=&sort_by=raj2000&sort_order=asc\
&show_non_periodic=true&show_without_class=true&asassn_discov_only=false&";

const PHOTOMETRY_FILTERS: &str =
    "vmag_min=&vmag_max=&epochs_min=&epochs_max=&rms_min=&rms_max=&sort_by=raj2000";

/// The two searchable ASAS-SN databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Database {
    Variables,
    Photometry,
}

impl Database {
    pub fn from_name(name: &str) -> Option<Database> {
        match name.to_lowercase().as_str() {
            "variables" | "variable_stars" | "v" => Some(Database::Variables),
            "photometry" | "p" => Some(Database::Photometry),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Database::Variables => "Variable Stars Database",
            Database::Photometry => "Photometry Database",
        }
    }

    /// Search URL with every optional filter left empty and rows sorted by RA.
    pub fn search_url(&self, host: &str, params: &QueryParams) -> String {
        let host = host.trim_end_matches('/');
        match self {
            Database::Variables => format!(
                "{}/variables?ra={}&dec={}&radius={}&{}",
                host, params.ra, params.dec, params.radius, VARIABLES_FILTERS
            ),
            Database::Photometry => format!(
                "{}/photometry?utf8=%E2%9C%93&ra={}&dec={}&radius={}&{}",
                host, params.ra, params.dec, params.radius, PHOTOMETRY_FILTERS
            ),
        }
    }

    /// Directory, relative to the working directory, for downloaded light curves.
    pub fn output_dir(&self) -> &'static str {
        match self {
            Database::Variables => "variable_stars_database",
            Database::Photometry => "photometry_database",
        }
    }

    /// Columns the results table must publish for this database.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Database::Variables => &[],
            Database::Photometry => &[DISTANCE_COLUMN],
        }
    }
}

/// Query position and radius, kept as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    /// degrees
    pub ra: String,
    /// degrees
    pub dec: String,
    /// arcmin
    pub radius: String,
}

impl QueryParams {
    pub fn new(ra: &str, dec: &str, radius: Option<&str>) -> QueryParams {
        QueryParams {
            ra: ra.trim().to_string(),
            dec: dec.trim().to_string(),
            radius: radius.unwrap_or("1").trim().to_string(),
        }
    }

    /// The query position in degrees, if both values are numeric or sexagesimal.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((sky::parse_ra(&self.ra)?, sky::parse_dec(&self.dec)?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub cells: Vec<String>,
    /// link target of the first cell, relative to the catalog host
    pub href: Option<String>,
}

/// The striped results table of a search page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsTable {
    pub headers: Vec<String>,
    pub rows: Vec<ResultRow>,
}

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Parse(format!("bad selector {}: {:?}", css, e)))
}

fn element_text(e: ElementRef) -> String {
    e.text().collect::<String>().trim().to_string()
}

impl ResultsTable {
    /// Parses the first `table.table-striped` of a search page.
    pub fn from_html(html: &str) -> Result<ResultsTable> {
        let document = Html::parse_document(html);
        let table = document
            .select(&selector("table.table-striped")?)
            .next()
            .ok_or_else(|| Error::Parse("results table not found".to_string()))?;
        let thead = table
            .select(&selector("thead")?)
            .next()
            .ok_or_else(|| Error::Parse("results table has no header".to_string()))?;
        let tbody = table
            .select(&selector("tbody")?)
            .next()
            .ok_or_else(|| Error::Parse("results table has no body".to_string()))?;

        let headers: Vec<String> = thead.select(&selector("th")?).map(element_text).collect();

        let td = selector("td")?;
        let a = selector("a")?;
        let mut rows = Vec::new();
        for tr in tbody.select(&selector("tr")?) {
            let mut cells = Vec::new();
            let mut href = None;
            for (i, cell) in tr.select(&td).enumerate() {
                let anchor = cell.select(&a).next();
                match anchor {
                    Some(anchor) if i == 0 => {
                        href = anchor.value().attr("href").map(|h| h.trim().to_string());
                        cells.push(element_text(anchor));
                    }
                    _ => cells.push(element_text(cell)),
                }
            }
            rows.push(ResultRow { cells, href });
        }
        Ok(ResultsTable { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Fails with the first of `names` the table does not publish.
    pub fn require_columns(&self, names: &[&str]) -> Result<()> {
        match names.iter().find(|n| self.column(n).is_none()) {
            Some(missing) => Err(Error::Parse(format!(
                "results table has no '{}' column (columns: {})",
                missing,
                self.headers.join(", ")
            ))),
            None => Ok(()),
        }
    }

    fn coordinate_columns(&self) -> Option<(usize, usize)> {
        let find = |prefix: &str| {
            self.headers
                .iter()
                .position(|h| h.to_lowercase().starts_with(prefix))
        };
        Some((find("ra")?, find("dec")?))
    }

    /// Index of the row to use as the match.
    ///
    /// `Selection::First` trusts the catalog's sort order. `Selection::Nearest`
    /// measures every row against `target` and falls back to the first row when
    /// any position is missing or unparsable.
    pub fn select(&self, selection: Selection, target: Option<(f64, f64)>) -> usize {
        if selection == Selection::First || self.rows.len() < 2 {
            return 0;
        }
        match self.nearest(target) {
            Some(i) => i,
            None => {
                log::warn!("could not compare row positions, using the first row");
                0
            }
        }
    }

    fn nearest(&self, target: Option<(f64, f64)>) -> Option<usize> {
        let (ra0, dec0) = target?;
        let (ira, idec) = self.coordinate_columns()?;
        let mut best: Option<(usize, f64)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            let ra = sky::parse_ra(row.cells.get(ira)?)?;
            let dec = sky::parse_dec(row.cells.get(idec)?)?;
            let d = sky::angular_separation(ra0, dec0, ra, dec);
            log::debug!("row {}: separation {:.2} arcsec", i, d * 3600.);
            match best {
                Some((_, bd)) if bd <= d => {}
                _ => best = Some((i, d)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// How to pick the match among the result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    First,
    Nearest,
}

impl Selection {
    pub fn from_name(name: &str) -> Option<Selection> {
        match name.to_lowercase().as_str() {
            "first" => Some(Selection::First),
            "nearest" => Some(Selection::Nearest),
            _ => None,
        }
    }
}

/// One matched catalog source: column header to cell text, plus its detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogMatch {
    pub fields: Vec<(String, String)>,
    pub href: String,
}

impl CatalogMatch {
    pub fn from_row(table: &ResultsTable, index: usize, host: &str) -> Result<CatalogMatch> {
        let row = table
            .rows
            .get(index)
            .ok_or_else(|| Error::Parse(format!("results table has no row {}", index)))?;
        let link = row
            .href
            .as_ref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Parse("matched row has no detail link".to_string()))?;
        let href = if link.starts_with("http://") || link.starts_with("https://") {
            link.clone()
        } else {
            format!("{}{}", host.trim_end_matches('/'), link)
        };
        let fields = table
            .headers
            .iter()
            .cloned()
            .zip(row.cells.iter().cloned())
            .collect();
        Ok(CatalogMatch { fields, href })
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.field(name)
            .ok_or_else(|| Error::Parse(format!("matched row has no '{}' value", name)))
    }

    /// Where the source's time series is served.
    pub fn csv_url(&self) -> String {
        format!("{}.csv", self.href)
    }
}

impl std::fmt::Display for CatalogMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (k, v) in self.fields.iter() {
            writeln!(f, "{}: {}", k, v)?;
        }
        write!(f, "href: {}", self.href)
    }
}

/// Finds the Gaia EDR3 id on a variable star's detail page.
///
/// The label sits in a text node a few levels inside the block that also
/// holds the value in a `span.star-data__value`.
pub fn extract_edr3_id(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let value_sel = selector("span.star-data__value")?;
    let label = document
        .root_element()
        .descendants()
        .find(|n| n.value().as_text().map_or(false, |t| t.contains(EDR3_LABEL)))
        .ok_or_else(|| Error::Parse(format!("'{}' not found on detail page", EDR3_LABEL)))?;
    let block = label
        .ancestors()
        .nth(2)
        .and_then(ElementRef::wrap)
        .ok_or_else(|| Error::Parse(format!("'{}' field has no enclosing block", EDR3_LABEL)))?;
    let value = block
        .select(&value_sel)
        .next()
        .ok_or_else(|| Error::Parse(format!("'{}' field has no value", EDR3_LABEL)))?;
    let id: String = value.text().collect::<String>().replace('\n', "");
    let id = id.trim();
    if id.is_empty() {
        return Err(Error::Parse(format!("'{}' value is empty", EDR3_LABEL)));
    }
    if !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Parse(format!(
            "'{}' value '{}' is not a numeric id",
            EDR3_LABEL, id
        )));
    }
    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"
<html><body>
<table class="table table-striped">
  <thead><tr>
    <th>ASAS-SN Name</th><th>Other Names</th><th>RA</th><th>Dec</th><th>Mean Vmag</th>
  </tr></thead>
  <tbody>
    <tr>
      <td><a href="/variables/gaia_edr3_12345">ASASSN-V J000007.61+344026.3</a></td>
      <td>V0001 And</td><td>0.03171</td><td>34.67397</td><td>13.2</td>
    </tr>
    <tr>
      <td><a href="/variables/gaia_edr3_999">ASASSN-V J000010.00+344000.0</a></td>
      <td></td><td>0.04167</td><td>34.66667</td><td>14.8</td>
    </tr>
  </tbody>
</table>
</body></html>"#;

    const DETAIL: &str = r#"
<html><body><div class="star-data">
  <div class="star-data__row">
    <div class="star-data__label"><strong>EDR3_ID</strong></div>
    <span class="star-data__value">
12345
    </span>
  </div>
</div></body></html>"#;

    fn params() -> QueryParams {
        QueryParams::new("0.0317", "34.67396", Some("0.5"))
    }

    #[test]
    fn variables_url_embeds_query_and_empty_filters() {
        let url = Database::Variables.search_url(ASASSN_HOST, &params());
        assert!(url.starts_with(
            "https://asas-sn.osu.edu/variables?ra=0.0317&dec=34.67396&radius=0.5&vmag_min=&"
        ));
        assert!(url.contains("&sort_by=raj2000&sort_order=asc&"));
        assert!(url.ends_with("asassn_discov_only=false&"));
    }

    #[test]
    fn photometry_url() {
        let url = Database::Photometry.search_url("http://localhost/", &params());
        assert_eq!(
            url,
            "http://localhost/photometry?utf8=%E2%9C%93&ra=0.0317&dec=34.67396&radius=0.5\
&vmag_min=&vmag_max=&epochs_min=&epochs_max=&rms_min=&rms_max=&sort_by=raj2000"
        );
    }

    #[test]
    fn default_radius_is_one_arcmin() {
        assert_eq!(QueryParams::new("1", "2", None).radius, "1");
    }

    #[test]
    fn database_names() {
        assert_eq!(Database::from_name("Photometry"), Some(Database::Photometry));
        assert_eq!(Database::from_name("variables"), Some(Database::Variables));
        assert_eq!(Database::from_name("stars"), None);
    }

    #[test]
    fn parse_results_table() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        assert_eq!(table.headers.len(), 5);
        assert_eq!(table.rows.len(), 2);
        let first = &table.rows[0];
        assert_eq!(first.cells[0], "ASASSN-V J000007.61+344026.3");
        assert_eq!(first.href.as_deref(), Some("/variables/gaia_edr3_12345"));
        assert_eq!(first.cells[2], "0.03171");
    }

    #[test]
    fn empty_body_has_no_rows() {
        let html = r#"<table class="table-striped"><thead><tr><th>Name</th></tr></thead>
            <tbody></tbody></table>"#;
        let table = ResultsTable::from_html(html).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn missing_table_is_parse_error() {
        let err = ResultsTable::from_html("<html><p>maintenance</p></html>").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn match_uses_host_and_link() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        let record = CatalogMatch::from_row(&table, 0, ASASSN_HOST).unwrap();
        assert_eq!(record.href, "https://asas-sn.osu.edu/variables/gaia_edr3_12345");
        assert_eq!(record.csv_url(), "https://asas-sn.osu.edu/variables/gaia_edr3_12345.csv");
        assert_eq!(record.field("Other Names"), Some("V0001 And"));
        assert_eq!(record.field("Mean Vmag"), Some("13.2"));
        assert!(record.require("Distance (arcsec)").is_err());
    }

    #[test]
    fn required_columns_are_checked() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        assert!(table.require_columns(Database::Variables.required_columns()).is_ok());
        match table.require_columns(Database::Photometry.required_columns()) {
            Err(Error::Parse(msg)) => assert!(msg.contains(DISTANCE_COLUMN)),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn row_without_link_is_rejected() {
        let html = r#"<table class="table-striped"><thead><tr><th>Name</th></tr></thead>
            <tbody><tr><td>no link</td></tr></tbody></table>"#;
        let table = ResultsTable::from_html(html).unwrap();
        assert!(CatalogMatch::from_row(&table, 0, ASASSN_HOST).is_err());
    }

    #[test]
    fn first_selection_ignores_positions() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        assert_eq!(table.select(Selection::First, Some((0.04167, 34.66667))), 0);
    }

    #[test]
    fn nearest_selection_measures_rows() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        assert_eq!(table.select(Selection::Nearest, Some((0.04167, 34.66667))), 1);
        assert_eq!(table.select(Selection::Nearest, params().position()), 0);
    }

    #[test]
    fn nearest_selection_falls_back_to_first_row() {
        let table = ResultsTable::from_html(RESULTS).unwrap();
        assert_eq!(table.select(Selection::Nearest, None), 0);
        let mut garbled = table.clone();
        garbled.rows[1].cells[2] = "n/a".to_string();
        assert_eq!(garbled.select(Selection::Nearest, Some((0.04167, 34.66667))), 0);
    }

    #[test]
    fn edr3_id_from_detail_page() {
        assert_eq!(extract_edr3_id(DETAIL).unwrap(), "12345");
    }

    #[test]
    fn edr3_id_missing_label() {
        let err = extract_edr3_id("<html><body><span class=\"star-data__value\">1</span></body></html>")
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn edr3_id_missing_value() {
        let html = r#"<div><div><div><strong>EDR3_ID</strong></div></div></div>"#;
        assert!(matches!(extract_edr3_id(html), Err(Error::Parse(_))));
    }

    #[test]
    fn edr3_id_must_be_digits() {
        let html = DETAIL.replace("12345", "../12345");
        match extract_edr3_id(&html) {
            Err(Error::Parse(msg)) => assert!(msg.contains("../12345"), "{}", msg),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
