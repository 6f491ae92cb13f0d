//! Writers for the tab-separated SAINT input files.

use std::io::{self, Write};

use crate::domain::{Interaction, Prey, Sample};

pub const BAIT_FILE: &str = "bait.txt";
pub const PREY_FILE: &str = "prey.txt";
pub const INTERACTIONS_FILE: &str = "interactions.txt";

const SEPARATOR: &str = "\t";
const NEW_LINE: &str = "\n";

/// `name`, `bait`, `C`/`T`.
pub struct SaintBaitWriter<W: Write> {
    writer: W,
}

impl<W: Write> SaintBaitWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_sample(&mut self, sample: &Sample) -> io::Result<()> {
        write!(
            self.writer,
            "{}{SEPARATOR}{}{SEPARATOR}{}{NEW_LINE}",
            sample.name,
            sample.bait,
            sample.type_code()
        )
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `id`, `length`, `gene`.
pub struct SaintPreyWriter<W: Write> {
    writer: W,
}

impl<W: Write> SaintPreyWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_prey(&mut self, prey: &Prey) -> io::Result<()> {
        write!(
            self.writer,
            "{}{SEPARATOR}{}{SEPARATOR}{}{NEW_LINE}",
            prey.id, prey.length, prey.gene
        )
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// `sample`, `bait`, `prey`, `intensity`.
pub struct SaintInteractionWriter<W: Write> {
    writer: W,
}

impl<W: Write> SaintInteractionWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_interaction(&mut self, interaction: &Interaction) -> io::Result<()> {
        write!(
            self.writer,
            "{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{NEW_LINE}",
            interaction.sample.name,
            interaction.sample.bait,
            interaction.prey_id,
            interaction.intensity
        )
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
