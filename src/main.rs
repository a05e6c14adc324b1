/*
 * This file is part of rtd3.
 *
 * Copyright (C) 2025 rtd3 contributors
 *
 * rtd3 is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rtd3 is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rtd3. If not, see <https://www.gnu.org/licenses/>.
 */

use clap::Parser;
use rtd3::{cli, logging};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    logging::init(args.verbose)?;

    cli::run_cli(&args)?;
    Ok(())
}
