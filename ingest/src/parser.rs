use common::{Error, Listing, PropertyType, Result};
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;

/// Positions of the required columns, resolved once from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub id: usize,
    pub geo_lat: usize,
    pub geo_lng: usize,
    pub price: usize,
    pub name: usize,
    pub rooms_type_id: usize,
    pub total_area: usize,
    pub realty_type_id: usize,
}

impl ColumnMap {
    pub fn from_header(header: &StringRecord) -> Result<Self> {
        let indices: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, col)| (clean(col.trim_start_matches('\u{feff}')), i))
            .collect();

        let lookup = |name: &str| {
            indices
                .get(name)
                .copied()
                .ok_or_else(|| Error::MissingColumn(name.to_string()))
        };

        Ok(Self {
            id: lookup("id")?,
            geo_lat: lookup("geo_lat")?,
            geo_lng: lookup("geo_lng")?,
            price: lookup("price")?,
            name: lookup("name")?,
            rooms_type_id: lookup("rooms_type_id")?,
            total_area: lookup("total_area")?,
            realty_type_id: lookup("realty_type_id")?,
        })
    }
}

/// Strips any quote characters the reader left behind. Whitespace is data.
fn clean(raw: &str) -> &str {
    raw.trim_matches('"')
}

/// Missing trailing fields on ragged rows read as empty.
fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).map(clean).unwrap_or("")
}

fn required_f64(record: &StringRecord, index: usize, name: &'static str) -> Result<f64> {
    let raw = field(record, index);
    if raw.is_empty() {
        // Blank coordinates and prices stay at zero and get filtered later.
        return Ok(0.0);
    }
    raw.parse::<f64>().map_err(|_| Error::InvalidField {
        field: name,
        value: raw.to_string(),
    })
}

/// Turns one raw row into a `Listing`.
///
/// An unparsable `id`, `geo_lat`, `geo_lng` or `price` fails the row. The
/// optional `rooms_type_id` and `total_area` become `None` when they do not
/// parse, and a bad `realty_type_id` falls back to an apartment. Whether the
/// resulting listing is worth persisting is a separate check, see
/// [`Listing::is_persistable`].
pub fn parse_listing(record: &StringRecord, columns: &ColumnMap) -> Result<Listing> {
    let raw_id = field(record, columns.id);
    let id = raw_id.parse::<i64>().map_err(|_| Error::InvalidField {
        field: "id",
        value: raw_id.to_string(),
    })?;

    let latitude = required_f64(record, columns.geo_lat, "geo_lat")?;
    let longitude = required_f64(record, columns.geo_lng, "geo_lng")?;
    let price = required_f64(record, columns.price, "price")?;

    let rooms = field(record, columns.rooms_type_id).parse::<i64>().ok();
    let area = field(record, columns.total_area).parse::<f64>().ok();
    let property_type =
        PropertyType::from_code(field(record, columns.realty_type_id).parse::<i64>().ok());

    Ok(Listing {
        id,
        latitude,
        longitude,
        price,
        name: field(record, columns.name).to_string(),
        rooms,
        area,
        property_type,
    })
}

/// Streams listings out of delimited input with a header row.
///
/// Yields one item per data row: `Ok` for a parsed listing, `Err` for a row
/// that could not be decoded or parsed. Iteration continues past bad rows.
/// A failing input source yields one I/O `Error::Csv` and ends the stream.
pub struct ListingReader<R: Read> {
    reader: csv::Reader<R>,
    columns: ColumnMap,
    record: StringRecord,
    exhausted: bool,
}

impl<R: Read> ListingReader<R> {
    /// Reads the header and resolves the required columns. A missing header
    /// or missing column is fatal.
    pub fn new(input: R, delimiter: u8) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(delimiter)
            .from_reader(input);

        let mut header = StringRecord::new();
        if !reader.read_record(&mut header)? {
            return Err(Error::InvalidInput("input has no header row".to_string()));
        }
        let columns = ColumnMap::from_header(&header)?;

        Ok(Self {
            reader,
            columns,
            record: StringRecord::new(),
            exhausted: false,
        })
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }
}

impl<R: Read> Iterator for ListingReader<R> {
    type Item = Result<Listing>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(parse_listing(&self.record, &self.columns)),
            Ok(false) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                // Decode errors are per-row; a read failure ends the stream.
                if e.is_io_error() {
                    self.exhausted = true;
                }
                Some(Err(Error::Csv(e)))
            }
        }
    }
}
