//! Human-readable usage guide for the output tree.

use std::fmt::{self, Write};

use super::catalog::{CatalogDocument, CatalogStats};
use super::store::{CATALOG_FILE, GUIDE_FILE, METADATA_FILE};

/// Render `usage_guide.md`
pub fn render_usage_guide(
    catalog: &CatalogDocument,
    stats: &CatalogStats,
    web_prefix: &str,
) -> Result<String, fmt::Error> {
    let prefix = web_prefix.trim_end_matches('/');
    let mut out = String::new();

    writeln!(out, "# {}\n", catalog.metadata.name)?;
    writeln!(out, "{}\n", catalog.metadata.description)?;

    writeln!(out, "## Overview\n")?;
    writeln!(out, "| | |")?;
    writeln!(out, "|---|---|")?;
    writeln!(out, "| Products | {} |", catalog.metadata.total_products)?;
    writeln!(out, "| Success rate | {:.2}% |", stats.success_rate)?;
    writeln!(out, "| Total size | {} |", human_bytes(stats.total_bytes))?;
    writeln!(out, "| Average size | {} |", human_bytes(stats.average_bytes))?;
    writeln!(out, "| Duplicate groups | {} |", stats.duplicate_clusters)?;
    writeln!(out, "| Served from | `{}/` |\n", prefix)?;

    writeln!(out, "## Layout\n")?;
    writeln!(out, "```text")?;
    writeln!(out, "{}/", prefix)?;
    for (name, category) in &catalog.categories {
        writeln!(out, "├── {}/ ({} files)", name, category.count)?;
    }
    writeln!(out, "├── {}", METADATA_FILE)?;
    writeln!(out, "├── {}", CATALOG_FILE)?;
    writeln!(out, "└── {}", GUIDE_FILE)?;
    writeln!(out, "```\n")?;

    writeln!(out, "- `{}`: batch record with counters, entries and errors", METADATA_FILE)?;
    writeln!(out, "- `{}`: products grouped by category", CATALOG_FILE)?;
    writeln!(out, "- `<category>/`: stored files, named `<prefix>_<identifier>.<ext>`\n")?;

    writeln!(out, "## Catalog shape\n")?;
    writeln!(out, "```json")?;
    writeln!(
        out,
        r#"{{
  "metadata": {{ "name", "description", "version", "totalProducts", "categories", "duplicateGroups", "lastUpdated" }},
  "categories": {{
    "<category>": {{
      "name": "<Category>",
      "count": 1,
      "products": [
        {{ "id": "item_001", "originalId", "name", "image", "filename", "size", "hash", "dimensions", "aspectRatio", "originalUrl", "addedAt" }}
      ]
    }}
  }}
}}"#
    )?;
    writeln!(out, "```\n")?;

    writeln!(out, "## Usage\n")?;
    writeln!(out, "```tsx")?;
    writeln!(out, "import catalog from '{}/{}';", prefix, CATALOG_FILE)?;
    writeln!(out, "Object.values(catalog.categories).flatMap(c => c.products)")?;
    writeln!(out, "  .map(p => <img key={{p.id}} src={{p.image}} alt={{p.name}} />);")?;
    writeln!(out, "```\n")?;

    writeln!(
        out,
        "Fingerprints (`hash`) and dimensions are filled in by `drivecat dedup`. \
         Products sharing a `hash` are byte-identical."
    )?;

    Ok(out)
}

fn human_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}
