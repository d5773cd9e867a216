//! Command-line front end for the layer toolkit.
//!
//! Fetches counties from the configured map server, manages the local
//! layer store and publishes layer styles.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use dfci::county::{CountyFetcher, CountyService};
use dfci::export::{to_geojson_string, write_csv, ExportRecord};
use dfci::geometry::first_geojson_geometry;
use dfci::models::{
    EndpointType, LayerKind, NewEndpoint, NewPoint, NewPolygon, Properties, RecordUpdate,
};
use dfci::style::{
    endpoint_options, legend_options, parse_line_symbol, publish_layer_style, GeoServerClient,
    HexColor, LineDecoration, LineStyle, MarkSymbol, PointStyle, PolygonStyle, StyleParams,
};
use dfci::upload::{infer_value, process_upload, save_meta_file, upload_attributes, UploadFile};
use dfci::{Config, LayerStore};

#[derive(Parser, Debug)]
#[command(name = "dfci")]
#[command(about = "Manage drainage and flood-control infrastructure layers")]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "dfci.toml")]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List county names from the map server
    Counties,

    /// List the attribute columns of a shapefile bundle or CSV file
    Attributes {
        /// Files of the upload (.shp/.shx/.dbf/.prj or .csv)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Store every feature of an upload as an approved layer
    Upload {
        #[arg(long)]
        layer: String,

        /// Attribute columns to keep (comma-separated)
        #[arg(long, value_delimiter = ',')]
        attributes: Vec<String>,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Add a single point awaiting approval
    AddPoint {
        #[arg(long)]
        layer: String,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Attribute as key=value (repeatable)
        #[arg(long = "attr", value_parser = parse_key_val)]
        attributes: Vec<(String, serde_json::Value)>,
        /// Document to attach as metadata
        #[arg(long)]
        meta_file: Option<PathBuf>,
    },

    /// Add a single WKT polygon awaiting approval
    AddPolygon {
        #[arg(long)]
        layer: String,
        #[arg(long)]
        wkt: String,
        #[arg(long = "attr", value_parser = parse_key_val)]
        attributes: Vec<(String, serde_json::Value)>,
        #[arg(long)]
        meta_file: Option<PathBuf>,
    },

    /// Approve a pending record
    Approve { kind: LayerKind, id: u64 },

    /// List records awaiting approval
    Pending { kind: LayerKind },

    /// Delete a single record
    Delete { kind: LayerKind, id: u64 },

    /// Delete every record of a layer
    DeleteLayer { kind: LayerKind, layer: String },

    /// List stored layer names
    Layers,

    /// Print legend URLs for stored layers
    Legends,

    /// Generate and publish a layer style
    Style {
        #[command(subcommand)]
        style: StyleCommand,
    },

    /// Manage external WMS/WFS endpoints
    Endpoint {
        #[command(subcommand)]
        endpoint: EndpointCommand,
    },

    /// Export stored features
    Export {
        #[command(subcommand)]
        format: ExportCommand,
    },

    /// Query stored features
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(ClapArgs, Debug)]
struct StyleTarget {
    #[arg(long)]
    layer: String,

    /// Skip the existence check and assume the style is already registered
    #[arg(long, conflicts_with = "new")]
    exists: bool,

    /// Skip the existence check and register the style
    #[arg(long)]
    new: bool,

    /// Only print the document, do not publish
    #[arg(long)]
    dry_run: bool,
}

impl StyleTarget {
    fn exists_hint(&self) -> Option<bool> {
        match (self.exists, self.new) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
enum StyleCommand {
    Point {
        #[command(flatten)]
        target: StyleTarget,
        #[arg(long, default_value = "circle", value_parser = parse_mark)]
        symbol: MarkSymbol,
        #[arg(long, default_value_t = 8.0)]
        size: f64,
        #[arg(long, value_parser = parse_color)]
        fill: HexColor,
        #[arg(long, value_parser = parse_color)]
        stroke: HexColor,
        #[arg(long, default_value_t = 1.0)]
        stroke_width: f64,
    },
    Polygon {
        #[command(flatten)]
        target: StyleTarget,
        #[arg(long, value_parser = parse_color)]
        fill: HexColor,
        #[arg(long, default_value_t = 0.5)]
        opacity: f64,
        #[arg(long, value_parser = parse_color)]
        stroke: HexColor,
        #[arg(long, default_value_t = 1.0)]
        stroke_width: f64,
    },
    Line {
        #[command(flatten)]
        target: StyleTarget,
        #[arg(long, value_parser = parse_color)]
        stroke: HexColor,
        #[arg(long, default_value_t = 1.0)]
        stroke_width: f64,
        #[arg(long)]
        dash_array: Option<String>,
        #[arg(long)]
        dash_offset: Option<String>,
        /// Mark repeated along the line, or `none`
        #[arg(long, default_value = "none")]
        symbol: String,
        #[arg(long, default_value_t = 4.0)]
        symbol_size: f64,
        #[arg(long, default_value = "4 8")]
        symbol_dash_array: String,
    },
}

#[derive(Subcommand, Debug)]
enum EndpointCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        layer_type: EndpointType,
        #[arg(long)]
        url: String,
        /// Metadata entry as key=value, e.g. LAYERS=ws:layer (repeatable)
        #[arg(long = "meta", value_parser = parse_key_val)]
        metadata: Vec<(String, serde_json::Value)>,
    },
    Delete {
        id: u64,
    },
    List,
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    Geojson {
        kind: LayerKind,
        #[command(flatten)]
        filter: ExportFilter,
    },
    Csv {
        kind: LayerKind,
        #[command(flatten)]
        filter: ExportFilter,
    },
}

#[derive(ClapArgs, Debug)]
struct ExportFilter {
    /// Only this layer
    #[arg(long, conflicts_with = "county")]
    layer: Option<String>,
    /// Only this county
    #[arg(long)]
    county: Option<String>,
    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum QueryCommand {
    /// Points and polygons of a county
    County { name: String },
    /// Records of a layer
    Layer { kind: LayerKind, name: String },
    /// Records intersecting the first geometry of a GeoJSON file
    Geometry { kind: LayerKind, file: PathBuf },
}

fn parse_key_val(s: &str) -> std::result::Result<(String, serde_json::Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    Ok((key.trim().to_string(), infer_value(value)))
}

fn parse_color(s: &str) -> std::result::Result<HexColor, String> {
    s.parse().map_err(|e: dfci::DfciError| e.to_string())
}

fn parse_mark(s: &str) -> std::result::Result<MarkSymbol, String> {
    s.parse().map_err(|e: dfci::DfciError| e.to_string())
}

fn to_properties(pairs: Vec<(String, serde_json::Value)>) -> Properties {
    pairs.into_iter().collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config {}", args.config.display()))?;

    run(args.command, &config).await
}

async fn run(command: Command, config: &Config) -> Result<()> {
    let workspace = config.storage.workspace_dir.as_path();

    match command {
        Command::Counties => {
            let counties = load_counties(config).await?;
            for name in counties.county_options() {
                println!("{}", name);
            }
        }

        Command::Attributes { files } => {
            let files = read_files(&files)?;
            let columns = upload_attributes(workspace, &files)?;
            print_json(&columns)?;
        }

        Command::Upload {
            layer,
            attributes,
            files,
        } => {
            let files = read_files(&files)?;
            let counties = load_counties(config).await?;
            let store = open_store(config)?;
            let report = process_upload(workspace, &files, &layer, &attributes, &counties, &store)
                .context("Upload failed")?;
            print_json(&report)?;
        }

        Command::AddPoint {
            layer,
            lat,
            lon,
            attributes,
            meta_file,
        } => {
            let counties = load_counties(config).await?;
            let store = open_store(config)?;
            let new = NewPoint {
                layer_name: layer,
                latitude: lat,
                longitude: lon,
                attributes: to_properties(attributes),
                metadata: meta_properties(workspace, meta_file.as_deref())?,
            };
            let record = store.add_point(&counties, new)?;
            store.flush()?;
            print_json(&record)?;
        }

        Command::AddPolygon {
            layer,
            wkt,
            attributes,
            meta_file,
        } => {
            let counties = load_counties(config).await?;
            let store = open_store(config)?;
            let new = NewPolygon {
                layer_name: layer,
                geometry: wkt,
                attributes: to_properties(attributes),
                metadata: meta_properties(workspace, meta_file.as_deref())?,
            };
            let record = store.add_polygon(&counties, new)?;
            store.flush()?;
            print_json(&record)?;
        }

        Command::Approve { kind, id } => {
            let store = open_store(config)?;
            match kind {
                LayerKind::Points => print_json(&store.update_point(id, RecordUpdate::approve())?)?,
                LayerKind::Polygons => {
                    print_json(&store.update_polygon(id, RecordUpdate::approve())?)?
                }
            }
            store.flush()?;
        }

        Command::Pending { kind } => {
            let store = open_store(config)?;
            match kind {
                LayerKind::Points => print_json(&store.pending_points()?)?,
                LayerKind::Polygons => print_json(&store.pending_polygons()?)?,
            }
        }

        Command::Delete { kind, id } => {
            let store = open_store(config)?;
            match kind {
                LayerKind::Points => store.delete_point(id)?,
                LayerKind::Polygons => store.delete_polygon(id)?,
            }
            store.flush()?;
            info!("Deleted {} {}", kind, id);
        }

        Command::DeleteLayer { kind, layer } => {
            let store = open_store(config)?;
            let deleted = store.delete_layer(kind, &layer)?;
            store.flush()?;
            println!("{}", deleted);
        }

        Command::Layers => {
            let store = open_store(config)?;
            print_json(&store.layer_options()?)?;
        }

        Command::Legends => {
            let store = open_store(config)?;
            let layers = store.layer_options()?;
            let gs = &config.geoserver;
            print_json(&legend_options(&gs.wms_url, &gs.workspace, &layers))?;
        }

        Command::Style { style } => run_style(style, config).await?,

        Command::Endpoint { endpoint } => {
            let store = open_store(config)?;
            match endpoint {
                EndpointCommand::Add {
                    name,
                    layer_type,
                    url,
                    metadata,
                } => {
                    let endpoint = store.add_endpoint(NewEndpoint {
                        layer_name: name,
                        layer_type,
                        url,
                        metadata: to_properties(metadata),
                    })?;
                    print_json(&endpoint)?;
                }
                EndpointCommand::Delete { id } => store.delete_endpoint(id)?,
                EndpointCommand::List => print_json(&endpoint_options(&store.endpoints()?))?,
            }
            store.flush()?;
        }

        Command::Export { format } => {
            let store = open_store(config)?;
            match format {
                ExportCommand::Geojson { kind, filter } => match kind {
                    LayerKind::Points => {
                        let records = filtered_points(&store, &filter)?;
                        emit(filter.output.as_deref(), to_geojson_string(&records)?.as_bytes())?;
                    }
                    LayerKind::Polygons => {
                        let records = filtered_polygons(&store, &filter)?;
                        emit(filter.output.as_deref(), to_geojson_string(&records)?.as_bytes())?;
                    }
                },
                ExportCommand::Csv { kind, filter } => match kind {
                    LayerKind::Points => {
                        let records = filtered_points(&store, &filter)?;
                        emit_csv(&records, &filter)?;
                    }
                    LayerKind::Polygons => {
                        let records = filtered_polygons(&store, &filter)?;
                        emit_csv(&records, &filter)?;
                    }
                },
            }
        }

        Command::Query { query } => {
            let store = open_store(config)?;
            match query {
                QueryCommand::County { name } => {
                    println!("{}", to_geojson_string(&store.points_by_county(&name)?)?);
                    println!("{}", to_geojson_string(&store.polygons_by_county(&name)?)?);
                }
                QueryCommand::Layer { kind, name } => match kind {
                    LayerKind::Points => {
                        println!("{}", to_geojson_string(&store.points_by_layer(&name)?)?)
                    }
                    LayerKind::Polygons => {
                        println!("{}", to_geojson_string(&store.polygons_by_layer(&name)?)?)
                    }
                },
                QueryCommand::Geometry { kind, file } => {
                    let text = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let geometry = first_geojson_geometry(&text)?;
                    match kind {
                        LayerKind::Points => println!(
                            "{}",
                            to_geojson_string(&store.points_intersecting(&geometry)?)?
                        ),
                        LayerKind::Polygons => println!(
                            "{}",
                            to_geojson_string(&store.polygons_intersecting(&geometry)?)?
                        ),
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_style(style: StyleCommand, config: &Config) -> Result<()> {
    let (target, params) = match style {
        StyleCommand::Point {
            target,
            symbol,
            size,
            fill,
            stroke,
            stroke_width,
        } => (
            target,
            StyleParams::Point(PointStyle {
                symbol,
                size,
                fill,
                stroke,
                stroke_width,
            }),
        ),
        StyleCommand::Polygon {
            target,
            fill,
            opacity,
            stroke,
            stroke_width,
        } => (
            target,
            StyleParams::Polygon(PolygonStyle {
                fill,
                fill_opacity: opacity,
                stroke,
                stroke_width,
            }),
        ),
        StyleCommand::Line {
            target,
            stroke,
            stroke_width,
            dash_array,
            dash_offset,
            symbol,
            symbol_size,
            symbol_dash_array,
        } => {
            let decoration = parse_line_symbol(&symbol)?.map(|symbol| LineDecoration {
                symbol,
                size: symbol_size,
                dash_array: symbol_dash_array,
            });
            (
                target,
                StyleParams::Line(LineStyle {
                    stroke,
                    stroke_width,
                    dash_array,
                    dash_offset,
                    decoration,
                }),
            )
        }
    };

    if target.dry_run {
        let doc = dfci::style::render(&target.layer, &params)?;
        print!("{}", doc.body);
        return Ok(());
    }

    let client = GeoServerClient::new(&config.geoserver)?;
    let doc = publish_layer_style(&client, &target.layer, &params, target.exists_hint())
        .await
        .with_context(|| format!("Failed to publish style for '{}'", target.layer))?;
    info!("Style '{}' published", doc.name);
    Ok(())
}

async fn load_counties(config: &Config) -> Result<CountyService> {
    let fetcher = CountyFetcher::new(&config.geoserver)?;
    let counties = fetcher
        .load_service()
        .await
        .context("Failed to load county boundaries")?;
    info!("Loaded {} counties", counties.index().len());
    Ok(counties)
}

fn open_store(config: &Config) -> Result<LayerStore> {
    LayerStore::open(&config.storage.db_path).context("Failed to open layer store")
}

fn read_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    paths
        .iter()
        .map(|p| {
            UploadFile::from_path(p).with_context(|| format!("Failed to read {}", p.display()))
        })
        .collect()
}

fn meta_properties(workspace: &Path, meta_file: Option<&Path>) -> Result<Properties> {
    let mut metadata = Properties::new();
    if let Some(path) = meta_file {
        let file = UploadFile::from_path(path)?;
        let name = save_meta_file(workspace, &file)?;
        metadata.insert("meta_file".into(), serde_json::Value::from(name));
    }
    Ok(metadata)
}

fn filtered_points(store: &LayerStore, filter: &ExportFilter) -> Result<Vec<dfci::PointRecord>> {
    Ok(match (&filter.layer, &filter.county) {
        (Some(layer), _) => store.points_by_layer(layer)?,
        (None, Some(county)) => store.points_by_county(county)?,
        (None, None) => store.all_points()?,
    })
}

fn filtered_polygons(
    store: &LayerStore,
    filter: &ExportFilter,
) -> Result<Vec<dfci::PolygonRecord>> {
    Ok(match (&filter.layer, &filter.county) {
        (Some(layer), _) => store.polygons_by_layer(layer)?,
        (None, Some(county)) => store.polygons_by_county(county)?,
        (None, None) => store.all_polygons()?,
    })
}

fn emit_csv<R: ExportRecord>(records: &[R], filter: &ExportFilter) -> Result<()> {
    // Per-layer exports drop the id column
    let include_id = filter.layer.is_none();
    match &filter.output {
        Some(path) => write_csv(records, include_id, File::create(path)?)?,
        None => write_csv(records, include_id, io::stdout().lock())?,
    }
    Ok(())
}

fn emit(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
