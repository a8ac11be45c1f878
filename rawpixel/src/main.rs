use clap::Parser;
use rawpixel::cli::{self, Cfg, Command};
use rawpixel::codec::{CodecError, CodecResult, RawPixelCodec};
use rawpixel::mapping::its::ChipMappingIts;
use rawpixel::mapping::mft::ChipMappingMft;
use rawpixel::mapping::ChipMapping;
use rawpixel::pixels::ChipPixelData;
use ru_protocol::payload::PayloadBuffer;
use std::io::Write;

pub fn main() -> std::process::ExitCode {
    let cfg = Cfg::parse();
    cli::init_error_logger(&cfg);

    let result = match cfg.detector {
        cli::Detector::Its => run(&cfg, RawPixelCodec::new(ChipMappingIts::new())),
        cli::Detector::Mft => run(&cfg, RawPixelCodec::new(ChipMappingMft::new())),
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            rawpixel::display_error(&format!("processing failed: {e}"));
            std::process::ExitCode::from(1)
        }
    }
}

fn run<M: ChipMapping>(cfg: &Cfg, mut codec: RawPixelCodec<M>) -> CodecResult<()> {
    codec.set_verbosity(cfg.verbose);
    codec.set_padding_128(!cfg.compact_words);
    codec.open_input(&cfg.input)?;

    match &cfg.command {
        Command::Skim { output } => {
            let mut writer = std::io::BufWriter::new(std::fs::File::create(output)?);
            let mut skimmed = PayloadBuffer::new();
            while codec.skim_next_ru_data(&mut skimmed)? {
                writer.write_all(skimmed.as_slice()).map_err(CodecError::from)?;
                skimmed.clear();
            }
            writer.flush().map_err(CodecError::from)?;
        }
        Command::Decode => {
            let mut chip = ChipPixelData::default();
            while codec.next_chip_data(&mut chip)? {
                if cfg.verbose > 0 {
                    println!(
                        "chip {id:>5} {ir} hits: {n}",
                        id = chip.chip_id,
                        ir = chip.ir,
                        n = chip.hits.len()
                    );
                }
            }
        }
    }

    print!("{}", codec.decoding_stats());
    for ru_sw in 0..codec.mapping().n_rus() {
        if let Some(stats) = codec.ru_stats_sw(ru_sw) {
            if stats.n_errors() > 0 {
                println!("RU {ru_sw} errors:");
                print!("{stats}");
            }
        }
    }
    Ok(())
}
