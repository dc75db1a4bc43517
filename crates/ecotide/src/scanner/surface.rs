use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use super::entity::{EntityId, ProductEntity};
use super::markup;

const SEARCH_RESULT_MARKER: &str = "data-component-type=\"s-search-result\"";
const PRODUCT_TITLE_MARKER: &str = "id=\"producttitle\"";
const ASIN_INPUT_MARKER: &str = "name=\"asin\"";

/// The rendered page (or fragment) a scan enumerates products from.
pub trait PageSurface {
    fn product_entities(&self) -> Result<Vec<ProductEntity>, SurfaceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("unable to read page snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Saved storefront markup, either a single product page or a page of
/// search results.
#[derive(Debug, Clone)]
pub struct HtmlSurface {
    url: Option<String>,
    html: String,
}

impl HtmlSurface {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            url: None,
            html: html.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Replaces the markup, e.g. after more results were appended.
    pub fn replace_markup(&mut self, html: impl Into<String>) {
        self.html = html.into();
    }

    pub fn entities(&self) -> Vec<ProductEntity> {
        let lowered = markup::lower(&self.html);
        if let Some(entity) = self.product_page(&lowered) {
            return vec![entity];
        }
        self.search_results(&lowered)
    }

    fn product_page(&self, lowered: &str) -> Option<ProductEntity> {
        let marker = lowered.find(PRODUCT_TITLE_MARKER)?;
        let (_, open_end) = markup::enclosing_tag(&self.html, marker)?;
        let name = tag_name(lowered, marker)?;
        let title = markup::element_text(&self.html, open_end, &format!("</{name}"))?;
        if title.is_empty() {
            return None;
        }

        let site_id = self
            .asin_input(lowered)
            .or_else(|| self.data_asin(lowered))
            .or_else(|| self.url.as_deref().and_then(asin_from_url));

        Some(ProductEntity {
            id: EntityId::product_page(site_id.as_deref(), &title),
            label: title,
            site_id,
        })
    }

    fn asin_input(&self, lowered: &str) -> Option<String> {
        let marker = lowered.find(ASIN_INPUT_MARKER)?;
        let (start, end) = markup::enclosing_tag(&self.html, marker)?;
        markup::attribute(&self.html[start..end], "value").filter(|asin| !asin.is_empty())
    }

    fn data_asin(&self, lowered: &str) -> Option<String> {
        markup::find_all(lowered, "data-asin=")
            .into_iter()
            .find_map(|marker| {
                let (start, end) = markup::enclosing_tag(&self.html, marker)?;
                markup::attribute(&self.html[start..end], "data-asin")
                    .filter(|asin| !asin.is_empty())
            })
    }

    fn search_results(&self, lowered: &str) -> Vec<ProductEntity> {
        let markers = markup::find_all(lowered, SEARCH_RESULT_MARKER);
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for (index, marker) in markers.iter().enumerate() {
            let Some((start, open_end)) = markup::enclosing_tag(&self.html, *marker) else {
                continue;
            };
            let block_end = markers
                .get(index + 1)
                .and_then(|next| self.html[..*next].rfind('<'))
                .unwrap_or(self.html.len());
            let block_end = block_end.max(open_end);

            let asin = markup::attribute(&self.html[start..open_end], "data-asin")
                .filter(|asin| !asin.is_empty());
            let Some(asin) = asin else {
                continue;
            };

            let block = &self.html[open_end..block_end];
            let block_lower = &lowered[open_end..block_end];
            let Some(title) = block_lower.find("<h2").and_then(|h2| {
                let h2_end = block[h2..].find('>')? + h2 + 1;
                markup::element_text(block, h2_end, "</h2")
            }) else {
                continue;
            };
            if title.is_empty() {
                continue;
            }

            let id = EntityId::positional(index, &asin);
            if seen.insert(id.clone()) {
                entities.push(ProductEntity {
                    id,
                    label: title,
                    site_id: Some(asin),
                });
            }
        }

        entities
    }
}

impl PageSurface for HtmlSurface {
    fn product_entities(&self) -> Result<Vec<ProductEntity>, SurfaceError> {
        Ok(self.entities())
    }
}

/// Page snapshot on disk, re-read on every scan so edits show up as new
/// entities.
#[derive(Debug, Clone)]
pub struct HtmlFileSurface {
    path: PathBuf,
    url: Option<String>,
}

impl HtmlFileSurface {
    pub fn new(path: impl Into<PathBuf>, url: Option<String>) -> Self {
        Self {
            path: path.into(),
            url,
        }
    }
}

impl PageSurface for HtmlFileSurface {
    fn product_entities(&self) -> Result<Vec<ProductEntity>, SurfaceError> {
        let html = fs::read_to_string(&self.path).map_err(|source| SurfaceError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let mut surface = HtmlSurface::new(html);
        if let Some(url) = &self.url {
            surface = surface.with_url(url.clone());
        }
        Ok(surface.entities())
    }
}

/// Lowercase name of the tag whose opening `<` precedes `pos`.
fn tag_name(lowered: &str, pos: usize) -> Option<String> {
    let start = lowered.get(..pos)?.rfind('<')? + 1;
    let name: String = lowered[start..]
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric())
        .collect();
    (!name.is_empty()).then_some(name)
}

/// ASIN from a `/dp/<ASIN>` or `/gp/product/<ASIN>` product URL.
fn asin_from_url(url: &str) -> Option<String> {
    ["/dp/", "/gp/product/"].iter().find_map(|marker| {
        let start = url.find(marker)? + marker.len();
        let candidate: String = url[start..]
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric())
            .collect();
        (candidate.len() == 10).then(|| candidate.to_ascii_uppercase())
    })
}
