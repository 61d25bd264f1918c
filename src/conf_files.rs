use crate::error::CircosError;
use crate::layout::{Layout, PlotSpec};
use std::fs;
use std::path::Path;

/// Static ideogram block copied next to the rendered configuration, as the
/// external renderer expects to include it from the same directory.
pub const IDEOGRAM_CONF: &str = "\
<ideogram>

<spacing>
default = 0.005r
</spacing>

radius    = 0.90r
thickness = 5p
fill      = yes

stroke_color     = dgrey
stroke_thickness = 1p

show_label     = no
label_font     = default
label_radius   = 1r + 75p
label_size     = 30
label_parallel = yes

</ideogram>
";

pub const TICKS_CONF: &str = "\
show_ticks       = yes
show_tick_labels = yes

<ticks>
radius     = 1r
color      = black
thickness  = 2p
multiplier = 1e-6
format     = %d

<tick>
spacing = 5u
size    = 10p
</tick>

<tick>
spacing      = 25u
size         = 15p
show_label   = yes
label_size   = 20p
label_offset = 10p
format       = %d
</tick>

</ticks>
";

/// Renders the plots block: one stanza per tile plot, then one per
/// non-tile plot, in layout order.
pub fn plots_conf(layout: &Layout) -> String {
    let mut text = String::from("<plots>\n");
    for spec in &layout.tile_plots {
        text.push('\n');
        text.push_str(&tile_stanza(spec));
    }
    for spec in &layout.non_tile_plots {
        text.push('\n');
        text.push_str(&value_stanza(spec));
    }
    text.push_str("\n</plots>\n");
    text
}

fn tile_stanza(spec: &PlotSpec) -> String {
    let thickness = spec
        .thickness
        .map(|t| format!("thickness        = {t}p\n"))
        .unwrap_or_default();
    format!(
        "<plot>\n\
         type             = {}\n\
         file             = {}\n\
         {thickness}\
         color            = {}\n\
         r1               = {}r\n\
         r0               = {}r\n\
         layers           = 1\n\
         stroke_thickness = 0\n\
         </plot>\n",
        spec.plot_type.keyword(),
        spec.file.display(),
        spec.color,
        spec.r1,
        spec.r0,
    )
}

fn value_stanza(spec: &PlotSpec) -> String {
    let min = spec
        .min
        .map(|v| format!("min   = {v:.1}\n"))
        .unwrap_or_default();
    let max = spec
        .max
        .map(|v| format!("max   = {v:.1}\n"))
        .unwrap_or_default();
    let extend_bin = if spec.extend_bin {
        "extend_bin = no\n"
    } else {
        ""
    };
    let backgrounds = spec
        .background_color
        .as_deref()
        .map(|color| {
            format!("<backgrounds>\n<background>\ncolor = {color}\n</background>\n</backgrounds>\n")
        })
        .unwrap_or_default();
    format!(
        "<plot>\n\
         type  = {}\n\
         file  = {}\n\
         color = {}\n\
         r1    = {}r\n\
         r0    = {}r\n\
         {min}{max}{extend_bin}{backgrounds}\
         </plot>\n",
        spec.plot_type.keyword(),
        spec.file.display(),
        spec.color,
        spec.r1,
        spec.r0,
    )
}

/// Renders the image block for the external renderer.
pub fn image_conf(job_dir: &Path, image_size: u32) -> String {
    format!(
        "<image>\n\
         dir     = {}\n\
         file    = circos.png\n\
         png     = yes\n\
         svg     = no\n\
         radius  = {}p\n\
         angle_offset = -90\n\
         background   = white\n\
         auto_alpha_colors = yes\n\
         auto_alpha_steps  = 5\n\
         </image>\n",
        job_dir.display(),
        image_size / 2
    )
}

/// Renders the top-level configuration tying karyotype and includes together.
pub fn circos_conf(job_dir: &Path) -> String {
    let conf_dir = job_dir.join("conf");
    format!(
        "karyotype = {}\n\
         chromosomes_units = 1000000\n\
         chromosomes_display_default = yes\n\
         \n\
         <<include {}/ideogram.conf>>\n\
         <<include {}/ticks.conf>>\n\
         <<include {}/image.conf>>\n\
         <<include {}/plots.conf>>\n\
         \n\
         <<include etc/colors_fonts_patterns.conf>>\n\
         <<include etc/housekeeping.conf>>\n",
        job_dir.join("data").join("karyotype.txt").display(),
        conf_dir.display(),
        conf_dir.display(),
        conf_dir.display(),
        conf_dir.display(),
    )
}

/// Writes the three rendered configuration files plus the two static
/// includes into `<job_dir>/conf`. Any failure here aborts the job.
pub fn write_conf_files(
    job_dir: &Path,
    layout: &Layout,
    image_size: u32,
) -> Result<(), CircosError> {
    let conf_dir = job_dir.join("conf");
    let files = [
        ("plots.conf", plots_conf(layout)),
        ("image.conf", image_conf(job_dir, image_size)),
        ("circos.conf", circos_conf(job_dir)),
        ("ideogram.conf", IDEOGRAM_CONF.to_string()),
        ("ticks.conf", TICKS_CONF.to_string()),
    ];
    for (name, text) in files {
        log::info!("Writing config file '{name}'");
        fs::write(conf_dir.join(name), text).map_err(|e| {
            CircosError::io(format!("Could not write required config file '{name}': {e}"))
        })?;
    }
    Ok(())
}
