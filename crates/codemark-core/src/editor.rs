//! An editor: the document model plus its view conversions.

use crate::collect::code_blocks;
use crate::config::HighlightConfig;
use crate::document::Document;
use crate::error::ModelError;
use crate::view::{ConversionRegistry, render_code_block};

#[derive(Debug)]
pub struct Editor {
    pub model: Document,
    pub conversion: ConversionRegistry,
}

impl Editor {
    pub fn new(model: Document) -> Self {
        Self {
            model,
            conversion: ConversionRegistry::default(),
        }
    }

    /// Render every top-level code block with its markers, in document order.
    pub fn render_code_blocks(&self, config: &HighlightConfig) -> Result<Vec<String>, ModelError> {
        code_blocks(&self.model.root, config)
            .map(|(index, block)| {
                render_code_block(
                    block,
                    index,
                    self.model.markers(),
                    &self.conversion,
                    |name| config.is_line_break(name),
                )
            })
            .collect()
    }
}
