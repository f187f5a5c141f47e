//! `dep` command: print the resolved build order

use anyhow::Result;

use super::GlobalOptions;
use crate::core::resolver::Resolver;

/// Print the build order, one lower-cased name per line or as a JSON array
pub fn execute(options: &GlobalOptions, components: &[String], missing: bool) -> Result<()> {
    let (_config, registry) = options.load()?;
    let plan = Resolver::new(&registry).resolve(components, missing)?;
    let names: Vec<String> = plan.iter().map(|c| c.name().to_lowercase()).collect();

    print!("{}", render(&names, options.output.json)?);
    Ok(())
}

fn render(names: &[String], json: bool) -> Result<String> {
    if json {
        Ok(format!("{}\n", serde_json::to_string(names)?))
    } else {
        Ok(names.iter().map(|n| format!("{n}\n")).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lines() {
        let names = vec!["zlib".to_string(), "libpng".to_string()];
        assert_eq!(render(&names, false).unwrap(), "zlib\nlibpng\n");
    }

    #[test]
    fn test_render_json() {
        let names = vec!["zlib".to_string(), "libpng".to_string()];
        assert_eq!(render(&names, true).unwrap(), "[\"zlib\",\"libpng\"]\n");
        assert_eq!(render(&[], true).unwrap(), "[]\n");
    }
}
