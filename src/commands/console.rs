use clap::Args;

use logcores::logging::Builder;

#[derive(Args, Debug)]
pub struct Cmd {}

impl Cmd {
    pub fn configure(&self, builder: Builder) -> Builder {
        builder.with_console_sink()
    }
}
